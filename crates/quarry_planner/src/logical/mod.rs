pub mod logical_aggregate;
pub mod logical_exchange;
pub mod logical_join;
pub mod logical_limit;
pub mod logical_output;
pub mod logical_project;
pub mod logical_scan;
pub mod logical_setop;
pub mod logical_window;
pub mod logical_write;
pub mod operator;
