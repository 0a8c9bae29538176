use rand::distributions::{Alphanumeric, DistString};

pub fn random_string(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), len)
}

pub fn random_owner() -> String {
    random_string(6)
}
