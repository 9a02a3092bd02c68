// Table and image handling for exported views

pub mod decode;
pub mod image;
pub mod render;
pub mod table;
pub mod text;

pub use image::{Image, ImageFormat};
pub use table::{CellValue, ColumnType, Table, TableError};
