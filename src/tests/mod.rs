mod runtime;

mod test_common_validation;
