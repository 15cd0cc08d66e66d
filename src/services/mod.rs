pub mod minio;
pub mod rabbitmq;
