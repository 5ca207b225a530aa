pub mod bootcamp;
pub mod common;
pub mod expense;
pub mod member;
pub mod team;

pub use bootcamp::{Bootcamp, BootcampRegistration, NewBootcamp, NewRegistration};
pub use common::{Displayable, Identifiable, Persisted};
pub use expense::{Expense, ExpenseCategory, ExpenseStatus, NewExpense};
pub use member::{Address, Member, NewMember, Role};
pub use team::{NewTeam, Team};
