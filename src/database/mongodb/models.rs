pub mod accommodation;
pub mod rating;
pub mod recommendation;

pub use self::accommodation::Accommodation;
pub use self::rating::Rating;
pub use self::recommendation::Recommendation;

pub type UserId = i32;
pub type AccoId = i32;
