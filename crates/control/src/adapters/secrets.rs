use crate::ports::SecretGenerator;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random suffix in generated key names
const NAME_SUFFIX_LEN: usize = 5;

/// Length of generated key secrets
const SECRET_LEN: usize = 16;

/// Key names and secrets drawn from the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSecretGenerator;

fn alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

impl SecretGenerator for RandomSecretGenerator {
    fn gen_name(&self) -> String {
        format!("key{}", alphanumeric(NAME_SUFFIX_LEN))
    }

    fn gen_secret(&self) -> String {
        alphanumeric(SECRET_LEN)
    }
}
