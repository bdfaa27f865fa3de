pub mod user;
pub mod seat;

pub use user::{User, UserId};
pub use seat::{Seat, SeatKey};
