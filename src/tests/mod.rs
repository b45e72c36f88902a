pub mod common;

mod concurrent_refresh;
