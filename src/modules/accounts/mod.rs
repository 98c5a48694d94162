pub mod model;
pub mod store;

pub use model::{Account, AccountStatus};
pub use store::{AccountStore, JsonAccountStore, StoreError, UniqueField};
