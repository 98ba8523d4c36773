mod videos;
