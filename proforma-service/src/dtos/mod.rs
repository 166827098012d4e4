pub mod customers;
pub mod drafts;
pub mod sales;

pub use customers::CreateCustomerRequest;
pub use drafts::{
    CommitDraftRequest, DraftResponse, SlotAddedResponse, UpdateExpenseRequest, UpdateItemRequest,
};
pub use sales::{AddExpenseRequest, UpdateAdvanceRequest};
