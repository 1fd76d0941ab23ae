
mod request;
mod request_body;
