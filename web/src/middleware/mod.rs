pub(crate) mod access_key;
