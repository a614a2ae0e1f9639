mod helpers;
mod failure_injection;
