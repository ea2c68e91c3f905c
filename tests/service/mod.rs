mod message_tests;
