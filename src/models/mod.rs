pub mod user;
pub mod movie;
pub mod hall;
pub mod seat;
pub mod screening;
pub mod order;
pub mod review;

pub use user::{NewUser, User};
pub use movie::{Movie, NewMovie};
pub use hall::{Cinema, Hall, NewCinema, NewHall};
pub use seat::{Seat, SeatClass};
pub use screening::{NewScreening, Screening, ScreeningStatus};
pub use order::{ensure_distinct_seats, order_total, Order, OrderDraft, OrderStatus, PaymentStamp};
pub use review::{NewReview, Review};
