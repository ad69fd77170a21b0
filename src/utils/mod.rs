//! Various utilities functions and types

mod geometry;

pub use self::geometry::{Buffer, Physical, Point, Rectangle, Size};
