// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    CandidateCriteria, Gender, Interest, InterestDirection, InterestFilter, InterestPriority,
    InterestStats, InterestStatus, Match, MatchFactors, MatchStatus, PageRequest,
    PartnerPreferences, Profile, ScoredCandidate, ScoringWeights, StatusCounts,
    SubscriptionTier, UserAccount,
};
pub use requests::{
    GenerateMatchesRequest, ListInterestsQuery, ListMatchesQuery, RespondInterestRequest,
    SendInterestRequest, UpdateMatchRequest,
};
pub use responses::{
    ErrorResponse, GenerateMatchesResponse, HealthResponse, Paginated,
    SendInterestResponse,
};
