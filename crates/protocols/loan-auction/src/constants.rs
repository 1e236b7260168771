//! Contract function and tuple field names

/// Read-only functions on the loan protocol contract
pub mod loan_fn {
    pub const IS_INITIALIZED: &str = "is-initialized";
    pub const GET_LOAN_NONCE: &str = "get-loan-nonce";
    pub const GET_LOAN: &str = "get-loan";
    pub const GET_CURRENT_BID: &str = "get-current-bid";
    pub const GET_BID_COUNT: &str = "get-bid-count";
    pub const IS_BORROWER_OWNER: &str = "is-borrower-owner";
    pub const IS_LENDER_OWNER: &str = "is-lender-owner";
}

/// Read-only functions on the position marketplace contract
pub mod market_fn {
    pub const GET_LISTING: &str = "get-listing";
    pub const GET_OFFER_NONCE: &str = "get-offer-nonce";
    pub const GET_OFFER: &str = "get-offer";
}

/// Fields of the `get-loan` tuple
pub mod loan_field {
    pub const COLLATERAL_AMOUNT: &str = "collateral-amount";
    pub const BORROW_AMOUNT: &str = "borrow-amount";
    pub const COLLATERAL_ASSET: &str = "collateral-asset";
    pub const BORROW_ASSET: &str = "borrow-asset";
    pub const MAX_REPAYMENT: &str = "max-repayment";
    pub const REPAYMENT_AMOUNT: &str = "repayment-amount";
    pub const AUCTION_END_BLOCK: &str = "auction-end-block";
    pub const MATURITY_BLOCK: &str = "maturity-block";
    pub const BORROWER: &str = "borrower";
    pub const LENDER: &str = "lender";
    pub const STATUS: &str = "status";
}

/// Fields of the `get-current-bid` tuple
pub mod bid_field {
    pub const AMOUNT: &str = "amount";
    pub const BIDDER: &str = "bidder";
}

/// Fields of the marketplace listing and offer tuples
pub mod market_field {
    pub const SELLER: &str = "seller";
    pub const POSITION_TYPE: &str = "position-type";
    pub const ASKING_PRICE: &str = "asking-price";
    pub const BUYER: &str = "buyer";
    pub const AMOUNT: &str = "amount";
    pub const STATUS: &str = "status";
    pub const COUNTER_AMOUNT: &str = "counter-amount";
}

/// Single-flight resource names
pub const RESOURCE_LOAN_REFRESH: &str = "loan";
pub const RESOURCE_POSITION_SCAN: &str = "position";
pub const RESOURCE_MARKETPLACE_SCAN: &str = "marketplace";
