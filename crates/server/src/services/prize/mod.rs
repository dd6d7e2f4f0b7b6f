pub mod prize_service;

#[cfg(test)]
mod tests;
