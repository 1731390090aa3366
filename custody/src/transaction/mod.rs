//! # Transaction Module
//!
//! Everything between "a caller wants to move value" and "a signed blob".
//! Every payment, settings change, and trust line the service produces is a
//! [`Transaction`].
//!
//! ## Architecture
//!
//! ```text
//! types.rs      value types: TransactionType, Amount, Currency, Memo
//! request.rs    typed JSON requests, validated into ValidatedRequest
//! builder.rs    TransactionBuilder for unsigned transactions
//! sequencer.rs  per-account sequence leases
//! signing.rs    secp256k1 signing and signature verification
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Validate** the request with [`SignRequest::validate`].
//! 2. **Build** with [`TransactionBuilder`]. State `Populated`.
//! 3. **Sequence** under a [`SequenceLease`]. State `SequenceAssigned`.
//! 4. **Sign** with [`sign_transaction`]. State `Signed`.
//! 5. **Encode** with [`crate::codec::encode`]. State `Encoded`.
//!
//! Any stage can move the transaction to `Failed`, which is terminal.
//!
//! ## Design Decisions
//!
//! - Amounts never touch floating point. Native amounts are `u64` drops,
//!   issued amounts a normalised mantissa and exponent.
//! - The fee is fixed at the network minimum. No caller can raise it, so no
//!   caller can be tricked into burning reserve on fees.
//! - Sequences are fetched fresh from the ledger every time. A local cache
//!   would be faster and would also be wrong after any out-of-band
//!   transaction.

pub mod builder;
pub mod request;
pub mod sequencer;
pub mod signing;
pub mod types;

pub use builder::{Transaction, TransactionBuilder, TransactionKind};
pub use request::{
    AccountSetRequest, Destination, PaymentRequest, SignRequest, TrustLineRequest,
    ValidatedPayment, ValidatedRequest,
};
pub use sequencer::{SequenceLease, Sequencer};
pub use signing::{sign_transaction, verify_transaction_signature};
pub use types::{Amount, Currency, IssuedValue, Memo, TransactionState, TransactionType};
