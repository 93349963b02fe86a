pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

pub use bootcamp::{slugify, Bootcamp, BootcampSummary, Career, Location, BOOTCAMP_SCHEMA};
pub use course::{rounded_average_cost, Course, MinimumSkill, COURSE_SCHEMA};
pub use review::{Review, REVIEW_SCHEMA};
pub use user::{Role, User, USER_SCHEMA};
