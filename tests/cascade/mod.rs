mod custom_key_case1;
mod lifecycle_case1;
mod object_key_case1;
mod partition_aware_case1;
mod string_key_case1;
