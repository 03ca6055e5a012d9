/// Run phase definitions for tracking harvest progress
///
/// `ReadLinks` happens once; `FetchListing` through `Export` repeat for each
/// category; `Done` is reached after the last category is exported.
use std::fmt;

/// Represents the current phase of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Loading the category link list
    ReadLinks,

    // ===== Per-category phases =====
    /// Fetching the listing pages of the current category
    FetchListing,

    /// Parsing the fetched listing pages into product stubs
    ParseListing,

    /// Fetching and parsing the detail page of every stub
    FanOutDetails,

    /// Attaching details to stubs to form the category result
    MergeResults,

    /// Writing the category result to the result file
    Persist,

    /// Converting the result file into the spreadsheet export
    Export,

    // ===== Terminal =====
    /// Every category has been processed
    Done,
}

impl RunPhase {
    /// Returns true if a run may move from `self` to `next`
    ///
    /// After `Export` a run either starts the next category or finishes.
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (Self::ReadLinks, Self::FetchListing)
                | (Self::FetchListing, Self::ParseListing)
                | (Self::ParseListing, Self::FanOutDetails)
                | (Self::FanOutDetails, Self::MergeResults)
                | (Self::MergeResults, Self::Persist)
                | (Self::Persist, Self::Export)
                | (Self::Export, Self::FetchListing)
                | (Self::Export, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadLinks => "read_links",
            Self::FetchListing => "fetch_listing",
            Self::ParseListing => "parse_listing",
            Self::FanOutDetails => "fan_out_details",
            Self::MergeResults => "merge_results",
            Self::Persist => "persist",
            Self::Export => "export",
            Self::Done => "done",
        }
    }

    /// Returns all phases in run order
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::ReadLinks,
            Self::FetchListing,
            Self::ParseListing,
            Self::FanOutDetails,
            Self::MergeResults,
            Self::Persist,
            Self::Export,
            Self::Done,
        ]
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
