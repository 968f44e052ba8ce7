mod api_tests;
mod crawl_tests;
