pub mod client;
pub mod submitter;

#[cfg(test)]
mod test_server;
