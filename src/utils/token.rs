use rand::{distributions::Alphanumeric, thread_rng, Rng};

const API_KEY_PREFIX: &str = "ak_";
const API_KEY_LENGTH: usize = 40;

pub fn random_alphanumeric(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn generate_api_key() -> String {
    format!("{}{}", API_KEY_PREFIX, random_alphanumeric(API_KEY_LENGTH))
}
