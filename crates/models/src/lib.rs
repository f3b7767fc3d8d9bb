pub mod errors;
pub mod db;
pub mod user;
pub mod account;
pub mod account_query;

#[cfg(test)]
mod tests;
