mod test_utils;
mod byte_order_tests;
mod types_tests;
mod reader_tests;
mod decoder_tests;
