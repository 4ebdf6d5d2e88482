//! 基础设施层
//!
//! 持有稀缺资源（Page 和会话文件），只暴露能力，不认识题目和流程。

pub mod chrome_page;
pub mod page_driver;
pub mod query;
pub mod session_store;

pub use chrome_page::ChromePage;
pub use page_driver::{PageDriver, Shortcut};
pub use query::{
    query, query_elements, ElementRef, QueryField, QueryResult, QuerySchema, QueryTarget,
    SelectorRegistry,
};
pub use session_store::{OriginStorage, SessionState, SessionStore, StoredCookie};
