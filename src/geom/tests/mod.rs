mod test_hash_basic;
mod test_smooth_basic;
mod test_transform_basic;
