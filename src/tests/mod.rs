mod test_token_bucket;
