//! Hexagonal Architecture 포트 인터페이스.
//!
//! 구현: `gymlink-network` crate (reqwest), 테스트에서는 수제 mock.

pub mod member_directory;
pub mod notifier;
pub mod visit_feed;

pub use member_directory::MemberDirectory;
pub use notifier::Notifier;
pub use visit_feed::VisitFeed;
