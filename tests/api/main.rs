mod health;
mod helper;
mod rate_limit;
