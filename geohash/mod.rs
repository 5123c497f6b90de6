pub mod codec;
pub mod coordinate;
pub mod distance;
pub mod neighbors;
pub mod precision;

pub use codec::{decode, decode_bbox, encode, symbol_index, BoundingBox, ALPHABET, BITS_PER_CHAR};
pub use coordinate::Coordinate;
pub use distance::{distance, EARTH_RADIUS_KM};
pub use neighbors::{neighbor, neighbors, Direction};
pub use precision::{cell_size, precision_for_radius, MIN_QUERY_PRECISION};
