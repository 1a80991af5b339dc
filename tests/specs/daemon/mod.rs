mod cold_start;
mod heartbeat;
mod hardware_failure;
