mod common;
mod deploy_tests;
mod plan_tests;
mod status_tests;
mod verify_tests;
