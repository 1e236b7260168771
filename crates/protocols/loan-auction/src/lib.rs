//! Loan Auction Protocol Mirror
//!
//! Borrowers lock BTC-like collateral and auction a loan; lenders bid down
//! the repayment amount until the auction ends, after which the loan is
//! active until repaid or defaulted. Borrower and lender positions are NFTs
//! that can be listed on a separate marketplace contract.
//!
//! This crate only reads: it enumerates loans by sequential id, decodes them,
//! derives duration/interest/APY, and publishes immutable snapshots.

pub mod calculator;
pub mod constants;
pub mod fetch;
pub mod guard;
pub mod marketplace;
pub mod positions;
pub mod state;
pub mod view;

pub use calculator::{calculate_apy, calculate_interest_percent, compute_metrics};
pub use fetch::{
    batch_ranges, check_initialized, fetch_loan, get_record, get_total_record_count,
    refresh_loans,
};
pub use guard::{FlightGuard, SingleFlight};
pub use marketplace::{fetch_listings, fetch_offers_by};
pub use positions::scan_positions;
pub use state::{
    BidCount, CurrentBid, Listing, LoanMetrics, LoanRecord, LoanSnapshot, LoanStatus, Offer,
    Position, RefreshSummary,
};
pub use view::{LoanQuery, Role, SortDirection, SortKey};
