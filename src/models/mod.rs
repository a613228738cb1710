//! Data models for LibraryFlow

pub mod book;
pub mod enums;
pub mod loan;
pub mod member;
pub mod panel;
pub mod report;

// Re-export commonly used types
pub use book::{Book, BookData};
pub use enums::{LoanStatus, MemberStatus, MemberType};
pub use loan::{Loan, NewLoan};
pub use member::{Member, MemberData, NewMember};
pub use panel::{Panel, PanelView};
