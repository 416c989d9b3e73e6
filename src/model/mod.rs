pub mod error;
pub mod request_id;
pub mod task;

pub use error::ModelError;
pub use request_id::RequestId;
pub use task::{NewTask, Task, TaskId};
