mod config_errors;
