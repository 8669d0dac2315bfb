pub mod app_config;
pub mod database;
pub mod queue;
pub mod redis_repo;
pub mod reservation_repo;

pub use database::DbClient;
pub use queue::DelayedJobQueue;
pub use redis_repo::RedisClient;
pub use reservation_repo::PgReservationStore;
