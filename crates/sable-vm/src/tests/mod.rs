//! Integration tests for the VM

mod vm_integration_tests;
