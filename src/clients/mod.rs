pub mod lm_client;
