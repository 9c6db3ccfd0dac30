pub mod credentials;
pub mod highest_rank;
pub mod score_cache;
pub mod sync;
pub mod upstream;

pub use credentials::{ClientCredentialsProvider, CredentialProvider, StaticCredentials};
pub use highest_rank::{HighestRankStore, HighestRankTracker, MySqlHighestRankStore};
pub use score_cache::{RedisScoreCache, ScoreCache, UsernameIndex};
pub use sync::{PaginationDriver, PassOutcome, PassSummary, SyncSettings};
pub use upstream::{OsuRankingClient, RankingSource};
