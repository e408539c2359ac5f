//! Request handler tests

mod issue_test;
mod request_test;
