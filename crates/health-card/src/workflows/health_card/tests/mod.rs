mod common;
mod notifications;
mod review;
mod store;
