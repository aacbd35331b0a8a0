pub mod form;
pub mod form_field;
pub mod form_response;
pub mod user;

pub use form::{Form, FormDetail, FormWithOwner, NewForm};
pub use form_field::{FormField, NewFormField};
pub use form_response::{
    FormResponse, NewFormResponse, NewResponseField, ResponseField, ResponseFieldDetail,
    ResponseWithRespondent, SubmittedResponse,
};
pub use user::{NewUser, User};
