use crate::config::EngineConfig;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Crockford base32, the alphabet of every generated ID.
const ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Source of workflow, instance and user agent IDs.
///
/// Production code uses [`IdGenerator::from_entropy`]. Tests use
/// [`IdGenerator::seeded`] so that two generators with the same seed yield
/// the same sequence of IDs.
#[derive(Debug)]
pub struct IdGenerator {
    rng: Mutex<StdRng>,
    workflow_prefix: String,
    instance_prefix: String,
    user_agent_prefix: String,
    length: usize,
}

impl IdGenerator {
    pub fn from_entropy(config: &EngineConfig) -> Self {
        Self::with_rng(StdRng::from_entropy(), config)
    }

    pub fn seeded(seed: u64, config: &EngineConfig) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), config)
    }

    fn with_rng(rng: StdRng, config: &EngineConfig) -> Self {
        Self {
            rng: Mutex::new(rng),
            workflow_prefix: config.workflow_id_prefix.clone(),
            instance_prefix: config.instance_id_prefix.clone(),
            user_agent_prefix: config.user_agent_id_prefix.clone(),
            length: config.id_length,
        }
    }

    pub fn new_workflow_id(&self) -> String {
        self.generate(&self.workflow_prefix)
    }

    pub fn new_instance_id(&self) -> String {
        self.generate(&self.instance_prefix)
    }

    pub fn new_user_agent_id(&self) -> String {
        self.generate(&self.user_agent_prefix)
    }

    fn generate(&self, prefix: &str) -> String {
        let mut rng = self.rng.lock();
        let mut id = String::with_capacity(prefix.len() + self.length);
        id.push_str(prefix);
        for _ in 0..self.length {
            id.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
        }
        id
    }
}
