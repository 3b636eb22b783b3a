//! Connected-region labelling

use std::collections::VecDeque;

use crate::mask::Mask;
use super::Connectivity;

const FOUR_NEIGHBOURS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const EIGHT_NEIGHBOURS: [(isize, isize); 8] = [
    (1, 0), (-1, 0), (0, 1), (0, -1),
    (1, 1), (1, -1), (-1, 1), (-1, -1),
];

/// Region labels of a mask
///
/// Label 0 is background. Regions are numbered from 1 in row-major order of
/// their first cell.
#[derive(Debug, Clone)]
pub struct RegionLabels {
    pub width: usize,
    pub height: usize,
    pub labels: Vec<u32>,
    pub count: u32,
}

impl RegionLabels {
    pub fn label_at(&self, col: isize, row: isize) -> u32 {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return 0;
        }
        self.labels[row as usize * self.width + col as usize]
    }

    /// Cell indices of every region, indexed by `label - 1`
    pub fn regions(&self) -> Vec<Vec<usize>> {
        let mut regions = vec![Vec::new(); self.count as usize];
        for (idx, &label) in self.labels.iter().enumerate() {
            if label > 0 {
                regions[label as usize - 1].push(idx);
            }
        }
        regions
    }
}

/// Labels the maximal connected regions of true cells
pub fn label_regions(mask: &Mask, connectivity: Connectivity) -> RegionLabels {
    let (width, height) = (mask.width(), mask.height());
    let neighbours: &[(isize, isize)] = match connectivity {
        Connectivity::Four => &FOUR_NEIGHBOURS,
        Connectivity::Eight => &EIGHT_NEIGHBOURS,
    };

    let mut labels = vec![0u32; width * height];
    let mut count = 0u32;
    let mut queue = VecDeque::new();

    for start in 0..labels.len() {
        if !mask.cells()[start] || labels[start] != 0 {
            continue;
        }

        count += 1;
        labels[start] = count;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            let (col, row) = ((idx % width) as isize, (idx / width) as isize);
            for (dc, dr) in neighbours {
                let (nc, nr) = (col + dc, row + dr);
                if mask.get(nc, nr) {
                    let n = nr as usize * width + nc as usize;
                    if labels[n] == 0 {
                        labels[n] = count;
                        queue.push_back(n);
                    }
                }
            }
        }
    }

    RegionLabels { width, height, labels, count }
}
