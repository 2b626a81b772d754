mod users;

pub use users::MemoryUserStore;
