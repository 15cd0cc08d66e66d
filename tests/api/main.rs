mod health_check;
mod helpers;
mod history;
mod jobs;
mod metrics;
mod not_found;
mod openapi;
mod regex_search;
mod reset;
mod search;
mod uploads;
mod users;
