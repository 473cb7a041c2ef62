pub mod admin;
pub mod campus;
pub mod course;
pub mod notice;
pub mod question;
pub mod user;

pub use admin::{Entity as Admin, Model as AdminModel};
pub use campus::{Entity as Campus, Model as CampusModel};
pub use course::{Entity as Course, Model as CourseModel};
pub use notice::{Entity as Notice, Model as NoticeModel};
pub use question::{Entity as Question, Model as QuestionModel};
pub use user::{Entity as User, Model as UserModel};
