pub mod order_list;

pub use order_list::{load_order_lines, write_order_file};
